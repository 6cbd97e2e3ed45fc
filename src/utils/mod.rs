pub mod db_utils;
pub mod departamento_cache;
