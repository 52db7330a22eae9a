//! # milxly2nvg Library
//!
//! Streaming conversion of MILXLY military symbology documents into NATO
//! Vector Graphics (NVG) documents, with concurrent batch conversion of whole
//! directories.
//!
//! The core pipeline is synchronous and works on any [`std::io::Read`]:
//!
//! ```no_run
//! use milxly2nvg::{BufferedEmitter, LogDiagnostics, StreamingTranscoder, TranscodeOptions};
//!
//! let input = std::fs::File::open("plan.milxly")?;
//! let mut emitter = BufferedEmitter::new(std::fs::File::create("plan.milxly.nvg")?);
//! let report = StreamingTranscoder::new(TranscodeOptions::default(), &LogDiagnostics)
//!     .transcode(input, &mut emitter)?;
//! println!("{} points written", report.nodes_emitted);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bom;
pub mod cli;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod events;
pub mod file_discovery;
pub mod mapping;
pub mod model;
pub mod nvg;
pub mod output;
pub mod record;
pub mod symbol;
pub mod transcoder;

pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use convert::{ConversionOptions, ConversionOutcome, convert_file, default_output_path};
pub use diagnostics::{CollectingDiagnostics, Diagnostic, Diagnostics, LogDiagnostics, Severity};
pub use emitter::{BufferedEmitter, EmitStrategy, IncrementalEmitter, OutputEmitter};
pub use engine::{
    ConversionEngine, ConversionProgress, ConversionResults, ConversionStatus, EngineConfig,
    FileConversionResult, ProgressCallback,
};
pub use error::{
    ConversionError, DescriptorError, MappingError, RecordError, TranscodeError, TranscodeResult,
};
pub use file_discovery::{DiscoveryStats, FileDiscovery};
pub use mapping::{MappingPolicy, map_record};
pub use model::{Point, RecordModel};
pub use nvg::{NvgDocument, NvgPoint, OutputNode};
pub use output::Output;
pub use symbol::{SymbolDescriptor, SymbolDescriptorParser};
pub use transcoder::{StreamingTranscoder, TranscodeOptions, TranscodeReport};
