pub mod db;
pub mod dependencies;
pub mod history;
pub mod replay;
pub mod work_items;

pub use db::Db;
pub use history::{NewAction, StepData};
pub use work_items::{ActiveFilter, Edge, ItemDetails, ListFilter, Side};
