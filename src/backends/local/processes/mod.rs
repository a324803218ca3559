// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod chain;
pub mod delay;
pub mod echo;
pub mod sum;

pub use chain::ChainProcess;
pub use delay::DelayProcess;
pub use echo::EchoProcess;
pub use sum::SumProcess;
