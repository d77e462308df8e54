//! Widget insertion helpers

use crate::node::Position;
use crate::traits::EditorModel;

/// Best position for inserting a block widget at the current selection.
///
/// - a selected object: right after it
/// - caret in an empty block: inside that block
/// - caret at the end of a block: after the block
/// - caret elsewhere in a block: before the block
/// - caret outside any block: the caret itself
pub fn find_optimal_insertion_position<M: EditorModel>(model: &M) -> Position {
    if let Some(selected) = model.selection().selected_element() {
        if model.is_object(selected) {
            if let Some(after) = model.position_after(selected) {
                return after;
            }
        }
    }

    let focus = model.selection_focus();
    let block = model
        .ancestors_and_self(focus.parent)
        .into_iter()
        .find(|node| model.is_block(*node) && !model.is_root(*node));

    let Some(block) = block else {
        return focus;
    };

    if model.is_empty(block) {
        return Position::new(block, 0);
    }

    let at_end = focus.parent == block && focus.offset >= model.children(block).len();
    let position = if at_end {
        model.position_after(block)
    } else {
        model.position_before(block)
    };
    position.unwrap_or(focus)
}

/// Element that will receive a widget inserted at `position`.
///
/// An empty non-root parent is replaced by the widget, so the widget really
/// lands one level up.
pub fn insertion_parent<M: EditorModel>(model: &M, position: Position) -> crate::NodeId {
    let parent = position.parent;
    if model.is_empty(parent) && !model.is_root(parent) {
        return model.parent(parent).unwrap_or(parent);
    }
    parent
}
