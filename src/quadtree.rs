//! Quadtree spatial index over collider bounding boxes.
//!
//! Nodes live in a flat, pooled vector and reference their children by index,
//! so a rebuild never chases or invalidates pointers: the pool is logically
//! reset (node 0 becomes the sole root again, the rest is retained as free
//! capacity) and every per-node item buffer keeps its allocation.

use crate::{
    collider::Collider,
    core::{algebra::Vector2, arrayvec::ArrayVec, pool::Handle},
    math::aabb::AxisAlignedBoundingBox,
};

const ROOT: u32 = 0;

/// Split policy of the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QuadTreeSettings {
    /// Maximum node depth; the root is at depth zero. Nodes at this depth
    /// never split, whatever their load.
    pub max_depth: u32,
    /// How many colliders a node may hold directly before it attempts to
    /// split.
    pub node_capacity: usize,
}

impl Default for QuadTreeSettings {
    fn default() -> Self {
        Self {
            max_depth: 5,
            node_capacity: 8,
        }
    }
}

/// A single node of the tree. Exposed read-only for debug drawing and tests.
#[derive(Debug)]
pub struct QuadTreeNode {
    bounds: AxisAlignedBoundingBox,
    items: Vec<(Handle<Collider>, AxisAlignedBoundingBox)>,
    children: Option<[u32; 4]>,
    depth: u32,
}

impl QuadTreeNode {
    fn new(bounds: AxisAlignedBoundingBox, depth: u32) -> Self {
        Self {
            bounds,
            items: Vec::new(),
            children: None,
            depth,
        }
    }

    #[inline]
    pub fn bounds(&self) -> AxisAlignedBoundingBox {
        self.bounds
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Indices of the NW, NE, SW, SE children, if the node has split.
    #[inline]
    pub fn children(&self) -> Option<[u32; 4]> {
        self.children
    }

    /// Handles of the colliders stored directly at this node.
    pub fn colliders(&self) -> impl Iterator<Item = Handle<Collider>> + '_ {
        self.items.iter().map(|(handle, _)| *handle)
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// See module docs.
#[derive(Debug)]
pub struct QuadTree {
    nodes: Vec<QuadTreeNode>,
    // Nodes at indices below the watermark belong to the current build, the
    // rest is retained free capacity. Invariant: every retained free node has
    // empty items and no children.
    alive: usize,
    bounds: AxisAlignedBoundingBox,
    settings: QuadTreeSettings,
    ancestor_stack: Vec<(Handle<Collider>, AxisAlignedBoundingBox)>,
}

impl QuadTree {
    pub fn new(bounds: AxisAlignedBoundingBox, settings: QuadTreeSettings) -> Self {
        Self {
            nodes: vec![QuadTreeNode::new(bounds, 0)],
            alive: 1,
            bounds,
            settings,
            ancestor_stack: Vec::new(),
        }
    }

    #[inline]
    pub fn bounds(&self) -> AxisAlignedBoundingBox {
        self.bounds
    }

    #[inline]
    pub fn settings(&self) -> QuadTreeSettings {
        self.settings
    }

    /// Index of the root node.
    #[inline]
    pub fn root(&self) -> u32 {
        ROOT
    }

    /// Borrows a node of the current build.
    ///
    /// # Panics
    ///
    /// Panics if the index does not belong to the current build.
    #[inline]
    pub fn node(&self, index: u32) -> &QuadTreeNode {
        &self.nodes[..self.alive][index as usize]
    }

    /// All nodes of the current build; index 0 is the root.
    #[inline]
    pub fn nodes(&self) -> &[QuadTreeNode] {
        &self.nodes[..self.alive]
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.alive
    }

    /// Total number of colliders stored across the current build.
    pub fn item_count(&self) -> usize {
        self.nodes().iter().map(|node| node.items.len()).sum()
    }

    /// Logically resets the tree for a rebuild: node 0 becomes the sole root
    /// over the world bounds again, every other node is marked free. No
    /// buffer is deallocated.
    pub fn reset(&mut self) {
        for node in self.nodes[..self.alive].iter_mut() {
            node.items.clear();
            node.children = None;
        }
        self.alive = 1;
        self.nodes[ROOT as usize].bounds = self.bounds;
        self.nodes[ROOT as usize].depth = 0;
    }

    fn alloc_node(&mut self, bounds: AxisAlignedBoundingBox, depth: u32) -> u32 {
        let index = self.alive;
        if index < self.nodes.len() {
            let node = &mut self.nodes[index];
            node.bounds = bounds;
            node.depth = depth;
        } else {
            self.nodes.push(QuadTreeNode::new(bounds, depth));
        }
        self.alive += 1;
        index as u32
    }

    /// Inserts a collider with the given world-space bounding box. The
    /// collider ends up in the deepest node that fully contains the box;
    /// boxes straddling a split line stay at the split node.
    pub fn insert(&mut self, collider: Handle<Collider>, aabb: AxisAlignedBoundingBox) {
        let mut index = ROOT;
        while let Some(children) = self.nodes[index as usize].children {
            match children
                .into_iter()
                .find(|child| self.nodes[*child as usize].bounds.is_contains_aabb(&aabb))
            {
                Some(child) => index = child,
                None => break,
            }
        }

        self.nodes[index as usize].items.push((collider, aabb));
        self.maybe_split(index);
    }

    fn maybe_split(&mut self, index: u32) {
        let node = &self.nodes[index as usize];
        if node.children.is_none()
            && node.items.len() > self.settings.node_capacity
            && node.depth < self.settings.max_depth
        {
            self.split(index);
        }
    }

    fn split(&mut self, index: u32) {
        let quadrants = self.nodes[index as usize].bounds.split();
        let child_depth = self.nodes[index as usize].depth + 1;

        let mut children = [ROOT; 4];
        for (quadrant, child) in quadrants.into_iter().zip(children.iter_mut()) {
            *child = self.alloc_node(quadrant, child_depth);
        }
        self.nodes[index as usize].children = Some(children);

        // Push the node contents down; whatever fits no child in full stays here.
        let mut items = std::mem::take(&mut self.nodes[index as usize].items);
        items.retain(|(handle, aabb)| {
            for child in children {
                if self.nodes[child as usize].bounds.is_contains_aabb(aabb) {
                    self.nodes[child as usize].items.push((*handle, *aabb));
                    return false;
                }
            }
            true
        });
        self.nodes[index as usize].items = items;

        for child in children {
            self.maybe_split(child);
        }
    }

    /// Collects handles of all colliders whose stored bounding box contains
    /// the point. The buffer is cleared first and retained by the caller.
    pub fn point_query(&self, point: Vector2<f32>, buffer: &mut Vec<Handle<Collider>>) {
        buffer.clear();
        self.point_query_recursive(ROOT, point, buffer);
    }

    fn point_query_recursive(
        &self,
        index: u32,
        point: Vector2<f32>,
        buffer: &mut Vec<Handle<Collider>>,
    ) {
        let node = &self.nodes[index as usize];
        if node.bounds.is_contains_point(point) {
            for (handle, aabb) in node.items.iter() {
                if aabb.is_contains_point(point) {
                    buffer.push(*handle);
                }
            }
            if let Some(children) = node.children {
                for child in children {
                    self.point_query_recursive(child, point, buffer);
                }
            }
        }
    }

    /// Collects handles of all colliders whose stored bounding box intersects
    /// the given box.
    pub fn aabb_query(
        &self,
        aabb: &AxisAlignedBoundingBox,
        buffer: &mut Vec<Handle<Collider>>,
    ) {
        buffer.clear();
        self.aabb_query_recursive(ROOT, aabb, buffer);
    }

    fn aabb_query_recursive(
        &self,
        index: u32,
        aabb: &AxisAlignedBoundingBox,
        buffer: &mut Vec<Handle<Collider>>,
    ) {
        let node = &self.nodes[index as usize];
        if node.bounds.is_intersects_aabb(aabb) {
            for (handle, item_aabb) in node.items.iter() {
                if item_aabb.is_intersects_aabb(aabb) {
                    buffer.push(*handle);
                }
            }
            if let Some(children) = node.children {
                for child in children {
                    self.aabb_query_recursive(child, aabb, buffer);
                }
            }
        }
    }

    /// Collects indices of the nodes whose bounds contain the point, without
    /// runtime allocations. Stops when the buffer is full.
    pub fn point_query_static<const CAP: usize>(
        &self,
        point: Vector2<f32>,
        buffer: &mut ArrayVec<u32, CAP>,
    ) {
        buffer.clear();
        self.point_query_static_recursive(ROOT, point, buffer);
    }

    fn point_query_static_recursive<const CAP: usize>(
        &self,
        index: u32,
        point: Vector2<f32>,
        buffer: &mut ArrayVec<u32, CAP>,
    ) {
        let node = &self.nodes[index as usize];
        if node.bounds.is_contains_point(point) {
            if buffer.try_push(index).is_err() {
                return;
            }
            if let Some(children) = node.children {
                for child in children {
                    self.point_query_static_recursive(child, point, buffer);
                }
            }
        }
    }

    /// Emits the broad-phase candidate pairs: every pair stored at the same
    /// node, plus every node item against the items of its ancestors. Each
    /// collider lives in exactly one node, so no pair can be emitted twice.
    /// Pairs whose bounding boxes do not even touch are culled here.
    pub(crate) fn collect_pairs(
        &mut self,
        buffer: &mut Vec<(Handle<Collider>, Handle<Collider>)>,
    ) {
        buffer.clear();
        let mut ancestors = std::mem::take(&mut self.ancestor_stack);
        ancestors.clear();
        self.collect_pairs_recursive(ROOT, &mut ancestors, buffer);
        self.ancestor_stack = ancestors;
    }

    fn collect_pairs_recursive(
        &self,
        index: u32,
        ancestors: &mut Vec<(Handle<Collider>, AxisAlignedBoundingBox)>,
        buffer: &mut Vec<(Handle<Collider>, Handle<Collider>)>,
    ) {
        let node = &self.nodes[index as usize];

        for (i, (handle, aabb)) in node.items.iter().enumerate() {
            for (other_handle, other_aabb) in node.items[(i + 1)..].iter() {
                if aabb.is_intersects_aabb(other_aabb) {
                    buffer.push((*handle, *other_handle));
                }
            }
            for (ancestor_handle, ancestor_aabb) in ancestors.iter() {
                if aabb.is_intersects_aabb(ancestor_aabb) {
                    buffer.push((*ancestor_handle, *handle));
                }
            }
        }

        if let Some(children) = node.children {
            let watermark = ancestors.len();
            ancestors.extend(node.items.iter().copied());
            for child in children {
                self.collect_pairs_recursive(child, ancestors, buffer);
            }
            ancestors.truncate(watermark);
        }
    }
}

#[cfg(test)]
mod test {
    use super::{QuadTree, QuadTreeSettings};
    use crate::{
        collider::Collider,
        core::{algebra::Vector2, pool::Handle, rand::prelude::*},
        math::aabb::AxisAlignedBoundingBox,
    };

    fn world_bounds() -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_min_max(Vector2::new(0.0, 0.0), Vector2::new(100.0, 100.0))
    }

    fn handle(n: u32) -> Handle<Collider> {
        Handle::new(n, 1)
    }

    fn small_box(x: f32, y: f32) -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_min_max(Vector2::new(x, y), Vector2::new(x + 1.0, y + 1.0))
    }

    #[test]
    fn node_splits_when_over_capacity() {
        let mut tree = QuadTree::new(world_bounds(), QuadTreeSettings::default());

        // All in the NW quadrant, one more than the node capacity.
        for i in 0..9 {
            tree.insert(handle(i), small_box(1.0 + i as f32, 1.0));
        }

        let root = tree.node(tree.root());
        assert!(root.children().is_some());
        assert_eq!(root.item_count(), 0);
        // Nothing is lost by the cascade of splits.
        assert_eq!(tree.item_count(), 9);

        let mut found = Vec::new();
        for i in 0..9 {
            tree.point_query(Vector2::new(1.5 + i as f32, 1.5), &mut found);
            assert!(found.contains(&handle(i)));
        }
    }

    #[test]
    fn straddling_box_stays_at_the_split_node() {
        let mut tree = QuadTree::new(world_bounds(), QuadTreeSettings::default());

        // Sits right across the vertical split line of the root.
        let straddler = AxisAlignedBoundingBox::from_min_max(
            Vector2::new(48.0, 10.0),
            Vector2::new(52.0, 12.0),
        );
        tree.insert(handle(100), straddler);

        for i in 0..9 {
            tree.insert(handle(i), small_box(1.0 + i as f32, 1.0));
        }

        let root = tree.node(tree.root());
        assert!(root.children().is_some());
        assert_eq!(root.item_count(), 1);
        assert_eq!(root.colliders().next(), Some(handle(100)));
    }

    #[test]
    fn depth_never_exceeds_the_limit() {
        let settings = QuadTreeSettings {
            max_depth: 3,
            node_capacity: 2,
        };
        let mut tree = QuadTree::new(world_bounds(), settings);

        // Everything piles up in the same corner; the tree must stop
        // splitting at max_depth even though nodes stay over capacity.
        for i in 0..64 {
            tree.insert(handle(i), small_box(0.5, 0.5));
        }

        assert!(tree.nodes().iter().all(|node| node.depth() <= 3));
        assert_eq!(tree.item_count(), 64);
    }

    #[test]
    fn reset_reuses_node_storage() {
        let mut tree = QuadTree::new(world_bounds(), QuadTreeSettings::default());

        for i in 0..32 {
            tree.insert(handle(i), small_box((i % 8) as f32 * 10.0, (i / 8) as f32 * 10.0));
        }
        let nodes_after_first_build = tree.node_count();
        assert!(nodes_after_first_build > 1);

        tree.reset();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.item_count(), 0);

        for i in 0..32 {
            tree.insert(handle(i), small_box((i % 8) as f32 * 10.0, (i / 8) as f32 * 10.0));
        }
        assert_eq!(tree.node_count(), nodes_after_first_build);
        assert_eq!(tree.item_count(), 32);
    }

    #[test]
    fn pair_collection_has_no_duplicates() {
        let mut tree = QuadTree::new(world_bounds(), QuadTreeSettings::default());

        // A cluster of mutually overlapping boxes plus one straddler that
        // overlaps the cluster from an ancestor node.
        for i in 0..12 {
            tree.insert(
                handle(i),
                AxisAlignedBoundingBox::from_min_max(
                    Vector2::new(40.0, 40.0),
                    Vector2::new(60.0, 60.0),
                ),
            );
        }

        let mut pairs = Vec::new();
        tree.collect_pairs(&mut pairs);

        let mut canonical: Vec<(u32, u32)> = pairs
            .iter()
            .map(|(a, b)| {
                let (a, b) = (a.index(), b.index());
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect();
        canonical.sort_unstable();
        let before = canonical.len();
        canonical.dedup();

        assert_eq!(before, canonical.len());
        // Every one of the 12 boxes overlaps every other.
        assert_eq!(canonical.len(), 12 * 11 / 2);
    }

    #[test]
    fn thousand_colliders_are_all_reachable() {
        let mut tree = QuadTree::new(world_bounds(), QuadTreeSettings::default());
        let mut rng = StdRng::seed_from_u64(0x7abb);

        let mut centers = Vec::new();
        for i in 0..1000 {
            let x = rng.gen_range(1.0..99.0);
            let y = rng.gen_range(1.0..99.0);
            let aabb = AxisAlignedBoundingBox::from_min_max(
                Vector2::new(x - 0.5, y - 0.5),
                Vector2::new(x + 0.5, y + 0.5),
            );
            centers.push((handle(i), Vector2::new(x, y)));
            tree.insert(handle(i), aabb);
        }

        // Traversal sees exactly the live colliders.
        assert_eq!(tree.item_count(), 1000);

        let mut found = Vec::new();
        let mut visited_nodes = 0usize;
        for (collider, center) in centers.iter() {
            tree.point_query(*center, &mut found);
            assert!(found.contains(collider));

            let mut path = crate::core::arrayvec::ArrayVec::<u32, 64>::new();
            tree.point_query_static(*center, &mut path);
            visited_nodes += path.len();
        }

        // The descent touches a handful of nodes per query, far below the
        // node count of the build.
        assert!(tree.node_count() > 16);
        assert!(visited_nodes / 1000 < 16);
    }
}
