/*!
 * One-off repairs of subtitle marker records.
 */

pub mod initial_ids;

pub use initial_ids::AddInitialPersistentSubtitleIds;
