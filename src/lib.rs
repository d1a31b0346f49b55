pub mod config;
pub mod flowchart;
pub mod graph;
pub mod identity;
pub mod ids;
pub mod import;
pub mod input_table;
pub mod model;
pub mod screen_def;
pub mod sequence;
pub mod sequence_diagram;
pub mod serialize;
pub mod text;
pub mod transition;
