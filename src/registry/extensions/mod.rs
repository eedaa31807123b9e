//! Engine extensions: iteration, list building and file access

mod files;
mod iteration;

pub use files::{
    FILES_ROOT, IterFilesFunction, LoadFileByNameFunction, REPORT_HTML_ROOT,
    ReadFileByNameFunction, WriteFileFunction, WriteJsonFileFunction,
};
pub use iteration::{AppendFunction, ClearFunction, IterMapFunction, IterateFunction};

use crate::registry::function::FunctionRegistry;

/// Register all engine extensions
pub fn register_extensions(registry: &mut FunctionRegistry) {
    registry.register_extension(IterateFunction);
    registry.register_extension(IterMapFunction);
    registry.register_extension(AppendFunction);
    registry.register_extension(ClearFunction);
    registry.register_extension(IterFilesFunction);
    registry.register_extension(LoadFileByNameFunction);
    registry.register_extension(ReadFileByNameFunction);
    registry.register_extension(WriteFileFunction);
    registry.register_extension(WriteJsonFileFunction);
}
