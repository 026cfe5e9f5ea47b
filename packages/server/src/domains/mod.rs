pub mod apps;
pub mod icons;
