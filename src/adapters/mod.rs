pub mod case_strategy;
pub mod catalogue;
pub mod examples;
pub mod executor;
pub mod format_registry;
pub mod loader;
pub mod pattern;
pub mod transport;
pub mod value_strategy;

#[cfg(test)]
mod case_strategy_test;
#[cfg(test)]
mod value_strategy_test;
