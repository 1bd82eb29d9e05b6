//! Rate Engine - 运费定价规则引擎
//!
//! # 架构概述
//!
//! 运营人员在这里维护一个定价方案：重量段模板、区域、区域×重量段价格矩阵、
//! 目的地调整与附加费。所有持久化都通过 [`rate_client::RateApi`] 完成，
//! 本 crate 负责本地校验、缓存对账与报价计算。
//!
//! # 模块结构
//!
//! ```text
//! rate-engine/src/
//! ├── segments.rs    # 重量段校验与规范化
//! ├── keys.rs        # 单元格键 (min, max)
//! ├── pricing/       # 行草稿、计价、摘要
//! ├── matrix.rs      # 区域×重量段矩阵投影
//! ├── occupancy.rs   # 省份占用
//! ├── reconcile.rs   # 方案缓存与服务端数据对账
//! ├── copy.rs        # 批量复制价格
//! ├── quote.rs       # 报价
//! ├── refresh.rs     # 防抖刷新
//! ├── workbench.rs   # 写操作入口
//! ├── config.rs      # 环境配置
//! └── utils/         # 日志
//! ```

pub mod config;
pub mod copy;
pub mod error;
pub mod keys;
pub mod matrix;
pub mod occupancy;
pub mod pricing;
pub mod quote;
pub mod reconcile;
pub mod refresh;
pub mod segments;
pub mod utils;
pub mod validation;
pub mod workbench;

pub use config::EngineConfig;
pub use copy::{CopyOptions, CopyReport, TargetOutcome, copy_to_targets};
pub use error::{EngineError, EngineResult};
pub use keys::{BracketKey, CellKey, seg_key};
pub use matrix::{KeyDiagnostics, MatrixColumn, MatrixGroup, ZoneMatrix, build_matrix};
pub use pricing::{CellPrice, RowDraft, compute_price, validate_draft_for_save};
pub use quote::{Dimensions, QuoteBreakdown, QuoteRequest, compute_quote};
pub use reconcile::{CacheRegistry, MergeReport, SchemeCache};
pub use refresh::{ChangeEvent, MatrixRefresher, MatrixSlot, RefreshHandle};
pub use segments::{SegmentDraft, SegmentError, validate_segments};
pub use workbench::{Confirmable, PricingWorkbench, ZoneSaveReport};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_level};
