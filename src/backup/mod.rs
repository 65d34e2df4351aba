pub mod archive;
pub mod backup_config;
pub mod interrupt;
pub mod naming;
pub mod progress;
pub mod prompt;
pub mod result_error;
pub mod stage;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
