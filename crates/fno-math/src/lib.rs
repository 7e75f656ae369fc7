//! Mathematical primitives for the 3D Fourier neural operator.

pub mod activation;
pub mod fft;
pub mod linalg;
