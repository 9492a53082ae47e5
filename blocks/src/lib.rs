pub mod bbuff;
pub mod block;
pub mod cursor;
pub mod datafile;
pub mod event;
pub mod path;
pub mod path_iter;
pub mod perf;
