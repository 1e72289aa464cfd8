use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GemmError {
    #[error("device error: {0}")]
    Device(#[from] bm_device::DeviceError),
    #[error("matrix error: {0}")]
    Matrix(#[from] bm_matrix::MatrixError),
}

pub type Result<T> = std::result::Result<T, GemmError>;
