//! Red-black tree based ordered multiset.
//!
//! ```
//! use rbtree::RedBlackTree;
//!
//! let mut tree = RedBlackTree::new();
//! for key in [5, 3, 8, 3] {
//!     tree.insert(key);
//! }
//!
//! let three = tree.find(&3).unwrap();
//! assert_eq!(tree.erase(three), Ok(3));
//! assert_eq!(tree.to_vec(10), [3, 5, 8]);
//! assert_eq!(tree.erase(three), Err(rbtree::Error::InvalidHandle));
//! ```

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod arena;
mod error;
pub mod red_black_tree;

pub use arena::NodeHandle;
pub use error::Error;
pub use red_black_tree::{Iter, RedBlackTree};
