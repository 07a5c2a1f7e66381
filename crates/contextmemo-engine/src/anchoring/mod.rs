/*!
 * # Anchoring Core
 *
 * Turns a live text selection into a durable **Anchor**, and turns that
 * anchor back into a live range on a later (possibly changed) copy of the
 * page.
 *
 * ## Data Flow
 *
 * ```text
 * selection ─▶ flatten ─▶ serialize_range ─▶ Anchor (persisted with the note)
 *
 * later page load:
 * Anchor ─▶ flatten ─▶ resolve_flat ─▶ ResolvedRange ─▶ apply_highlight
 * ```
 *
 * ### 1. Flattened Text Stream
 * - Every text leaf under a root, in depth-first pre-order, whitespace-only
 *   leaves included
 * - The concatenation is what anchoring searches; positions are
 *   `(unit, byte offset)` pairs
 * - Recomputed on every attempt, since the page may have changed
 *
 * ### 2. Anchor
 * - `selected_text` is the primary key and is never empty
 * - `prefix`/`suffix` hold up to 30 chars of whitespace-collapsed context and
 *   may be empty
 * - Optional structural boundaries (`id("x")` or `/tag[n]/...` paths plus a
 *   char offset) are a low-confidence fallback
 *
 * ### 3. Resolution Tiers
 * - **Context window**: normalized search over windows of up to 40 units,
 *   verified against prefix and suffix; earliest accepted hit wins
 * - **Structural**: address lookup, no text verification
 * - **Verbatim**: first raw occurrence inside one unit
 *
 * ### 4. Highlights
 * - A resolved range is wrapped in one `span` marker carrying the note id,
 *   splitting text nodes and partially covered elements as needed
 *
 * ## Module Structure
 *
 * - **`flatten`**: text-node flattener and stream positions
 * - **`normalize`**: whitespace collapsing and char/byte offset helpers
 * - **`range`**: `DomPoint`, `TextRange`, `ResolvedRange`
 * - **`address`**: structural addresses and their XPath-like encoding
 * - **`anchor`**: the anchor record and its persisted JSON shape
 * - **`serializer`**: selection to anchor
 * - **`resolver`**: anchor to range, strategy by strategy
 * - **`highlight`**: marker wrapping, lookup and removal
 *
 * ## Usage Pattern
 *
 * ```rust
 * use contextmemo_engine::anchoring::*;
 * use contextmemo_engine::dom::Document;
 *
 * let page = "<body><p>The quick brown fox jumps. The quick brown fox sleeps.</p></body>";
 *
 * // 1. Anchor the second "quick brown fox"
 * let doc = Document::parse_html(page);
 * let selection = TextRange::find_text(&doc, "quick brown fox", 1).unwrap();
 * let anchor = serialize_range(&doc, &selection, &AnchorOptions::default()).unwrap();
 *
 * // 2. Later, on a fresh copy of the page
 * let mut doc = Document::parse_html(page);
 * let flat = flatten(&doc, doc.body());
 * let resolution = resolve_flat(&doc, &flat, &anchor, &ResolveOptions::default()).unwrap();
 * assert_eq!(resolution.range.start_offset, 31);
 *
 * // 3. Wrap it for display
 * let marker = apply_highlight(&mut doc, &flat, &resolution.range, "note-1").unwrap();
 * assert_eq!(doc.text_content(marker), "quick brown fox");
 * ```
 */

pub mod address;
pub mod anchor;
pub mod flatten;
pub mod highlight;
pub mod normalize;
pub mod range;
pub mod resolver;
pub mod serializer;

pub use address::*;
pub use anchor::*;
pub use flatten::*;
pub use highlight::*;
pub use range::*;
pub use resolver::*;
pub use serializer::*;
