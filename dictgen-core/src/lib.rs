//! # dictgen-core
//!
//! Core library for the dictgen dictionary generator.
//!
//! This crate turns a record graph and a view specification into dictionary
//! entry markup: field resolution through a capability table, publication
//! filtering, sense numbering, relation ordering, letter headers, pagination
//! and media publishing.

pub mod class_name;
pub mod config;
pub mod context;
pub mod filter;
pub mod generator;
pub mod graph;
pub mod letters;
pub mod markup;
pub mod media;
pub mod numbering;
pub mod pagination;
pub mod relations;
pub mod schema;
pub mod view;
pub mod writer;

pub use config::Config;
pub use context::GeneratorContext;
pub use generator::{BatchOptions, BatchOutput, DictionaryGenerator, EntryFailure, Page, SortSpec};
pub use graph::{DisplayForm, FieldValue, Record, RecordGraph, RecordSource, Relation, RelationKind, RelationType};
pub use media::{AudioConverter, CommandConverter, MediaPublisher};
pub use pagination::{PageDirection, Pagination};
pub use schema::{CapabilityTable, ClassDef, FieldDef, Schema, ValueType};
pub use view::{ConfigNode, FieldRef, NodeOptions, ViewConfig};
pub use writer::{DocumentWriter, GenerateError};
