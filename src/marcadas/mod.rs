pub mod reconcile;
pub mod service;
pub mod source;

pub use service::{Funcion, Marcadas, MarcadasService};
pub use source::{MarcadaSource, MySqlMarcadaSource};
