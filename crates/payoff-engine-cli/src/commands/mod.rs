pub mod analysis;
pub mod basket;
pub mod payoff;
