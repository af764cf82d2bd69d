//! End-to-end scenarios driven through `Machine`.

mod backtracking;
mod capabilities;
mod cut;
mod exceptions;
mod solutions;
