use pyo3::prelude::*;

use hls::CommandDescriptor;

#[pyclass(name = "Command", skip_from_py_object)]
#[derive(Clone)]
pub struct PyCommand {
    #[pyo3(get)]
    pub program: String,
    #[pyo3(get)]
    pub args: Vec<String>,
    #[pyo3(get)]
    pub playlist_path: String,
}

impl From<CommandDescriptor> for PyCommand {
    fn from(cmd: CommandDescriptor) -> Self {
        PyCommand {
            program: cmd.program().to_string_lossy().into_owned(),
            playlist_path: cmd.playlist_path().to_string_lossy().into_owned(),
            args: cmd.into_args(),
        }
    }
}

#[pymethods]
impl PyCommand {
    fn __repr__(&self) -> String {
        format!(
            "Command(program='{}', args={:?}, playlist_path='{}')",
            self.program, self.args, self.playlist_path
        )
    }
}
