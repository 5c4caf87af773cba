pub mod panels;
pub mod widgets;
