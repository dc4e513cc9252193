// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth, board access checked per operation)
pub mod public; // Tier 1: No authentication required (/, /health, /auth/*)
pub mod protected; // Tier 2: JWT authentication required (/users/*, /dashboard/*)
