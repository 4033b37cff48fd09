pub mod host;
pub mod router;

pub use host::Host;
pub use router::Router;

/// Either kind of node the kernel can hold. Hosts terminate flows; routers
/// forward using a routing table and run the distance-vector control plane.
pub enum Node {
    Host(Host),
    Router(Router),
}
