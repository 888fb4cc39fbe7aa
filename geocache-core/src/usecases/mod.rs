mod error;
mod resolve;


pub use self::{error::Error, resolve::*};

pub type Result<T> = std::result::Result<T, Error>;

mod prelude {
    pub use super::{error::Error, Result};
    pub use crate::{cancel::*, db::*, entities::*};
}
