mod builder;
mod types;

use pyo3::prelude::*;

#[pymodule]
#[pyo3(name = "rtsp_hls")]
fn rtsp_hls_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<builder::PyCommandBuilder>()?;
    m.add_class::<types::PyCommand>()?;
    Ok(())
}
