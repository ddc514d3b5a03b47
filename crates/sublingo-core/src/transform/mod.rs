//! Transform Module
//!
//! Turns cue text from one language form into another. The dispatcher sits
//! between the sync loop and the providers:
//!
//! ```text
//! resolve(request) ──► cache ──► script check ──► in-flight set ──► provider
//!      │                 ▲                                            │
//!      ▼                 └──────────── insert on success ◄────────────┘
//! Ready / Pending                                   TransformEvent channel
//! ```

pub mod cache;
pub mod dispatcher;
pub mod provider;
pub mod providers;
pub mod script;

pub use cache::{CacheConfig, CacheStats, TransformCache};
pub use dispatcher::{Resolution, TransformDispatcher, TransformEvent};
pub use provider::{
    MockTranslator, MockTransliterator, TransformMode, TransformRequest, Translator,
    Transliterator,
};
pub use providers::{
    create_translator, create_transliterator, GoogleTranslator, MicrosoftTransliterator,
    ProviderConfig,
};
pub use script::{script_for, script_pair};
