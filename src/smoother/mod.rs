//! Smoothers
//!
//! One-pass smoothers (EKS, PrLS) and the iterated family built on them:
//!
//! | Linearization | Gauss-Newton | Levenberg-Marquardt | Line search |
//! |---------------|--------------|---------------------|-------------|
//! | Analytical    | IEKS         | LM-IEKS             | LS-IEKS     |
//! | SLR           | IPLS         | LM-IPLS             | LS-IPLS     |

pub mod iterated;
pub mod line_search;
pub mod one_pass;

pub use iterated::{IterationControl, IteratedSmoother, LmParams, SmoothingOutput};
pub use line_search::{ArmijoLineSearch, LineSearchStep};
pub use one_pass::{Eks, OnePassSmoother, PassOutput, PrLs};
