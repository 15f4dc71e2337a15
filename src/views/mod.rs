pub mod diseases;
pub mod form;
pub mod qas;
pub mod render;
pub mod scope;
pub mod selected;

/// State of one read operation as seen by the view that issued it. A failed
/// read is kept distinct from an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fetch<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Fetch<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Fetch::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Fetch::Loaded(value),
            Err(e) => Fetch::Failed(e.to_string()),
        }
    }
}
