pub mod month_window;
