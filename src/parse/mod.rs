pub mod line;
pub mod scanner;

pub use line::{TaskLine, classify, indent_depth, is_task_line};
pub use scanner::scan;
