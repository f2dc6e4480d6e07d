//! Ring positions and consistent selection over them.
pub mod consistent_hasher;
pub mod hash_function;
pub mod hashable;
pub mod number_searcher;

pub use consistent_hasher::{select_hashable, select_hashables};
pub use hash_function::Md5HashFunction;
pub use hashable::{DefaultHashable, Hashable};
