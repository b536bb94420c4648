//! # Layout System
//!
//! Table diagram layout via Taffy.
//!
//! ## Responsibilities
//! - **Header Row**: Fixed-width header cells left-to-right in column order.
//! - **Body Blocks**: One block per group (or a single block when ungrouped), stacked
//!   with a fixed gap between blocks.
//! - **Centroids**: The vertical midpoint of each group block, used as the fly-to /
//!   fly-from point of collapsing rows.
//!
//! ## Key Types
//! - `LayoutEngine`: Builds a Taffy tree for a table and reads it back.
//! - `TableLayout`: Positions in table-local coordinates (origin at the header's
//!   top-left corner).

use crate::config::Geometry;
use crate::errors::RenderError;
use crate::model::{key_column, Group, Table};
use crate::types::Point;
use taffy::geometry::Rect;
use taffy::prelude::*;
use tracing::instrument;

/// A header cell's horizontal slot.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSlot {
    pub column: String,
    pub x: f32,
}

/// A body row's slot; indexed by the row's position in the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSlot {
    pub position: Point,
    /// Index into the step's `groups`, when the row belongs to one.
    pub group: Option<usize>,
}

/// A contiguous block of rows sharing a group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBlock {
    pub key: String,
    pub top: f32,
    pub rows: usize,
    /// Y of a row slot centered on the block.
    pub centroid: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub headers: Vec<HeaderSlot>,
    pub rows: Vec<RowSlot>,
    pub blocks: Vec<GroupBlock>,
    /// Column used to attribute rows to groups, if the table is grouped.
    pub key_column: Option<usize>,
    pub width: f32,
    pub height: f32,
}

impl TableLayout {
    pub fn row_position(&self, row: usize) -> Option<Point> {
        self.rows.get(row).map(|slot| slot.position)
    }

    /// Centroid position of the group named `key`.
    pub fn centroid(&self, key: &str) -> Option<Point> {
        self.blocks
            .iter()
            .find(|b| b.key == key)
            .map(|b| Point::new(0.0, b.centroid))
    }

    /// Centroid of the group the given row was laid out in.
    pub fn centroid_of_row(&self, row: usize) -> Option<Point> {
        let group = self.rows.get(row)?.group?;
        self.blocks.get(group).map(|b| Point::new(0.0, b.centroid))
    }
}

/// Computes table layouts with Taffy.
///
/// Each call builds a fresh tree: a column container holding the header row and the
/// body, where the body is a column of blocks separated by `group_spacing`.
pub struct LayoutEngine {
    taffy: TaffyTree<()>,
    geometry: Geometry,
}

impl LayoutEngine {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            taffy: TaffyTree::new(),
            geometry,
        }
    }

    /// Lays out `table`, clustering rows by `groups` when present.
    ///
    /// Groups are joined to rows through the key column. If no column attributes every
    /// row to a group, the table is laid out as if it were ungrouped.
    #[instrument(level = "debug", skip_all, fields(columns = table.columns.len(), rows = table.rows.len()))]
    pub fn compute_layout(
        &mut self,
        table: &Table,
        groups: Option<&[Group]>,
    ) -> Result<TableLayout, RenderError> {
        self.taffy.clear();
        let g = &self.geometry;
        let table_width = table.columns.len() as f32 * g.cell_width;

        let grouping = groups.and_then(|groups| key_column(table, groups).map(|col| (groups, col)));

        // Row indices per block, in block order.
        let block_members: Vec<(Option<usize>, Vec<usize>)> = match grouping {
            Some((groups, col)) => groups
                .iter()
                .enumerate()
                .map(|(gi, group)| {
                    let members = (0..table.rows.len())
                        .filter(|&r| table.rows[r][col] == group.key)
                        .collect();
                    (Some(gi), members)
                })
                .collect(),
            None => vec![(None, (0..table.rows.len()).collect())],
        };

        let header_cells = table
            .columns
            .iter()
            .map(|_| self.taffy.new_leaf(fixed(g.cell_width, g.header_height)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(layout_error)?;
        let header = self
            .taffy
            .new_with_children(
                Style {
                    display: Display::Flex,
                    flex_direction: FlexDirection::Row,
                    flex_shrink: 0.0,
                    ..Default::default()
                },
                &header_cells,
            )
            .map_err(layout_error)?;

        let mut block_nodes = Vec::with_capacity(block_members.len());
        let mut row_nodes = Vec::with_capacity(block_members.len());
        for (_, members) in &block_members {
            let leaves = members
                .iter()
                .map(|_| self.taffy.new_leaf(fixed(table_width, g.row_height)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(layout_error)?;
            let block = self
                .taffy
                .new_with_children(column(0.0, 0.0), &leaves)
                .map_err(layout_error)?;
            block_nodes.push(block);
            row_nodes.push(leaves);
        }

        let body = self
            .taffy
            .new_with_children(column(g.group_spacing, g.body_margin), &block_nodes)
            .map_err(layout_error)?;
        let root = self
            .taffy
            .new_with_children(column(0.0, 0.0), &[header, body])
            .map_err(layout_error)?;

        self.taffy
            .compute_layout(root, Size::MAX_CONTENT)
            .map_err(layout_error)?;

        let headers = table
            .columns
            .iter()
            .zip(&header_cells)
            .map(|(column, &node)| {
                Ok(HeaderSlot {
                    column: column.clone(),
                    x: self.location(node)?.x,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        let body_origin = self.location(body)?;
        let mut rows = vec![
            RowSlot {
                position: Point::ZERO,
                group: None,
            };
            table.rows.len()
        ];
        let mut blocks = Vec::new();
        for ((group, members), (&block, leaves)) in
            block_members.iter().zip(block_nodes.iter().zip(&row_nodes))
        {
            let block_origin = self.location(block)?;
            let top = body_origin.y + block_origin.y;
            for (&row, &leaf) in members.iter().zip(leaves) {
                let local = self.location(leaf)?;
                rows[row] = RowSlot {
                    position: Point::new(
                        body_origin.x + block_origin.x + local.x,
                        top + local.y,
                    ),
                    group: *group,
                };
            }
            if let (Some(gi), Some((groups, _))) = (group, grouping) {
                let height = members.len() as f32 * g.row_height;
                blocks.push(GroupBlock {
                    key: groups[*gi].key.clone(),
                    top,
                    rows: members.len(),
                    centroid: top + height / 2.0 - g.row_height / 2.0,
                });
            }
        }

        let size = self.taffy.layout(root).map_err(layout_error)?.size;
        Ok(TableLayout {
            headers,
            rows,
            blocks,
            key_column: grouping.map(|(_, col)| col),
            width: size.width.max(table_width),
            height: size.height,
        })
    }

    fn location(&self, node: taffy::NodeId) -> Result<Point, RenderError> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        Ok(Point::new(layout.location.x, layout.location.y))
    }
}

fn layout_error(e: taffy::TaffyError) -> RenderError {
    RenderError::Layout(e.to_string())
}

fn fixed(width: f32, height: f32) -> Style {
    Style {
        size: Size {
            width: Dimension::length(width),
            height: Dimension::length(height),
        },
        flex_shrink: 0.0,
        ..Default::default()
    }
}

fn column(gap: f32, margin_top: f32) -> Style {
    Style {
        display: Display::Flex,
        flex_direction: FlexDirection::Column,
        flex_shrink: 0.0,
        gap: Size {
            width: LengthPercentage::length(0.0),
            height: LengthPercentage::length(gap),
        },
        margin: Rect {
            left: LengthPercentageAuto::length(0.0),
            right: LengthPercentageAuto::length(0.0),
            top: LengthPercentageAuto::length(margin_top),
            bottom: LengthPercentageAuto::length(0.0),
        },
        ..Default::default()
    }
}
