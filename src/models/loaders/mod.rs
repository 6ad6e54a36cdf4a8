pub mod toml_loader;

pub use toml_loader::{
    load_aptitude_seed, load_fallback_bank, AptitudeSeed, FallbackBank, FallbackTemplate,
};
