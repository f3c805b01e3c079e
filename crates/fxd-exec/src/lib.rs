//! Executor side of the desk: the pure command mapper, the executor port
//! with its two interchangeable implementations (live HTTP adapter and
//! deterministic simulator), and the edge-health monitor.

pub mod edge_health;
pub mod http;
pub mod mapper;
pub mod port;
pub mod sim;

pub use edge_health::{EdgeHealthMonitor, EhmAction, EhmAssessment};
pub use http::HttpExecutor;
pub use mapper::{map_commands, strategy_for, EmergencyExit, MapperContext, MapperOutput};
pub use port::{derive_execution_state, ExecStatus, ExecutorPort};
pub use sim::{SimHealthMode, SimulatedExecutor};
