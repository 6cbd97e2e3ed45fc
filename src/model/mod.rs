pub mod departamento;
pub mod marcada;
pub mod personal;
pub mod role;
pub mod usuario;
