pub mod divination_record;
pub mod hexagram;
