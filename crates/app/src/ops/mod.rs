pub mod add;
pub mod cat;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod url;

pub use add::Add;
pub use cat::Cat;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use mv::Mv;
pub use rm::Rm;
pub use url::Url;
