//! Shared domain — cross-cutting ресурсы и helpers
//!
//! - geometry: 2D/3D distance helpers (XZ-плоскость = карта)
//! - teams: allyteam таблица (кто кому союзник, ошибка радара)
//! - clock: номер симуляционного кадра
//! - terrain: высоты карты (height query)
//! - context: SimContext — явный bundle ресурсов для core операций

pub mod clock;
pub mod context;
pub mod geometry;
pub mod teams;
pub mod terrain;

pub use clock::*;
pub use context::*;
pub use geometry::*;
pub use teams::*;
pub use terrain::*;
