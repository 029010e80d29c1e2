pub mod id_pool;
