//! Task descriptor resolution.
//!
//! A task is a file somewhere under the task root, addressed by its path
//! relative to that root (`system/check_disk.sh`, `setup.py`). Resolution is
//! a pure filesystem check: a task either exists as a regular file or it
//! does not, and a missing task is never retried.

mod resolver;


pub use resolver::{TaskResolver, task_name};
