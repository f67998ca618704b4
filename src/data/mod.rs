//! Data layer: axes, loading, assembly, efficiency and slicing.
//!
//! Architecture:
//! ```text
//!  raw dir / simulation .csv / sheet .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse source → SourceRecord (load, table[f, P])
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ assemble  │  exact load lookup → RawTensor[load, f, P]
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ efficiency  │  V²/R / P_RF × 100 → EfficiencyTensor
//!   └────────────┘
//!        │
//!        ├──────────────┐
//!        ▼              ▼
//!   ┌──────────┐   ┌──────────┐
//!   │  slice    │   │  export   │
//!   └──────────┘   └──────────┘
//! ```

pub mod assemble;
pub mod axes;
pub mod efficiency;
pub mod export;
pub mod loader;
pub mod model;
pub mod slice;
