/// Router Module Index
///
/// Splits the routing table by what stands in front of it. Only the guarded router sits
/// behind the route guard; the public router must stay small and data-free.

/// Routes reachable without a session: health, login, logout.
pub mod public;

/// Every screen of the portal. Wrapped, fallback included, by the route guard middleware.
pub mod guarded;
