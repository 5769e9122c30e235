mod health;
mod layers;

pub use health::health_check;
pub use layers::{get_layer, layer_bounds, list_layers};
