//! Facade services
//!
//! Base services translate between plain data and kernel objects:
//! - [`EnumService`], [`IteratorService`], [`ConverterService`]
//! - [`EntitiesService`], [`ShapeGettersService`], [`GeomService`]
//!
//! Level services own one topological abstraction each and only reach down:
//! transforms, booleans, vertices, edges, wires, faces, shells, solids,
//! operations and fillets. Faces holds the single upward reference, a
//! late-bound link to fillets.

mod booleans;
mod converter;
mod edges;
mod entities;
mod enums;
mod faces;
mod fillets;
mod geom;
mod iterator;
mod operations;
mod shape_getters;
mod shells;
mod solids;
mod transforms;
mod vertices;
mod wires;

pub use booleans::BooleansService;
pub use converter::ConverterService;
pub use edges::EdgesService;
pub use entities::EntitiesService;
pub use enums::EnumService;
pub use faces::FacesService;
pub use fillets::FilletsService;
pub use geom::{ArcMode, GeomService};
pub use iterator::IteratorService;
pub use operations::OperationsService;
pub use shape_getters::ShapeGettersService;
pub use shells::ShellsService;
pub use solids::SolidsService;
pub use transforms::TransformsService;
pub use vertices::VerticesService;
pub use wires::WiresService;
