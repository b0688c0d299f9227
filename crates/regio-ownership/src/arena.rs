//! Abstract object arena.
//!
//! Objects and regions are keyed by integer handles. A region records its
//! entrypoint and, when it is nested, the object whose owned field holds
//! it. There are no pointers between records, so the ownership graph can
//! be cyclic at the class level without any reference cycles here.

use regio_ir::OpId;
use regio_types::ClassName;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region{}", self.0)
    }
}

/// Known contents of a field slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Object(ObjectId),
    Primitive,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub class: ClassName,
    pub region: RegionId,
    /// Slots known so far; absent slots are materialized on first access.
    fields: FxHashMap<SmolStr, Slot>,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub entry: ObjectId,
    /// Object whose owned field holds this region's entrypoint.
    pub parent: Option<ObjectId>,
    /// The `drop` that deallocated this region.
    pub dropped_at: Option<OpId>,
    /// Region outside the unit, reached through an unowned parameter.
    pub external: bool,
    objects: Vec<ObjectId>,
    /// Regions whose parent object lives in this region.
    children: FxHashSet<RegionId>,
}

impl Region {
    pub fn is_live(&self) -> bool {
        self.dropped_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    objects: Vec<Object>,
    regions: Vec<Region>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_region(&mut self, class: ClassName, external: bool) -> ObjectId {
        let region = RegionId(self.regions.len() as u32);
        let entry = ObjectId(self.objects.len() as u32);
        self.objects.push(Object {
            class,
            region,
            fields: FxHashMap::default(),
        });
        self.regions.push(Region {
            entry,
            parent: None,
            dropped_at: None,
            external,
            objects: vec![entry],
            children: FxHashSet::default(),
        });
        entry
    }

    /// Allocate a fresh top-level region and return its entrypoint.
    pub fn new_region(&mut self, class: ClassName) -> ObjectId {
        self.alloc_region(class, false)
    }

    /// Allocate an object standing for something in a region the unit
    /// does not own.
    pub fn new_external(&mut self, class: ClassName) -> ObjectId {
        self.alloc_region(class, true)
    }

    /// Allocate an object inside an existing region.
    pub fn new_object(&mut self, region: RegionId, class: ClassName) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Object {
            class,
            region,
            fields: FxHashMap::default(),
        });
        self.regions[region.0 as usize].objects.push(id);
        id
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }

    pub fn get_region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0 as usize)
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    pub fn region_of(&self, object: ObjectId) -> RegionId {
        self.object(object).region
    }

    /// The `drop` that deallocated the region `object` lives in.
    pub fn dropped_at(&self, object: ObjectId) -> Option<OpId> {
        self.region(self.region_of(object)).dropped_at
    }

    pub fn is_entry(&self, object: ObjectId) -> bool {
        self.region(self.region_of(object)).entry == object
    }

    pub fn field(&self, object: ObjectId, name: &str) -> Option<Slot> {
        self.object(object).fields.get(name).copied()
    }

    /// Store `slot` in `object.name`, returning the previous contents.
    pub fn set_field(&mut self, object: ObjectId, name: SmolStr, slot: Slot) -> Option<Slot> {
        self.objects[object.0 as usize].fields.insert(name, slot)
    }

    /// Whether `ancestor` is `region` or encloses it through owned fields.
    pub fn encloses(&self, ancestor: RegionId, region: RegionId) -> bool {
        let mut current = Some(region);
        while let Some(r) = current {
            if r == ancestor {
                return true;
            }
            current = self.region(r).parent.map(|p| self.region_of(p));
        }
        false
    }

    /// Nest `child` under `parent`. Returns `false` and leaves the arena
    /// unchanged when `parent` lives in `child` or in a region nested
    /// under it.
    pub fn attach(&mut self, child: RegionId, parent: ObjectId) -> bool {
        let parent_region = self.region_of(parent);
        if self.encloses(child, parent_region) {
            return false;
        }
        self.detach(child);
        self.regions[child.0 as usize].parent = Some(parent);
        self.regions[parent_region.0 as usize].children.insert(child);
        true
    }

    pub fn detach(&mut self, region: RegionId) {
        if let Some(parent) = self.regions[region.0 as usize].parent.take() {
            let parent_region = self.region_of(parent);
            self.regions[parent_region.0 as usize].children.remove(&region);
        }
    }

    /// Deallocate `region` together with every live region nested under it.
    /// Returns the objects that died.
    pub fn deallocate(&mut self, region: RegionId, op: OpId) -> Vec<ObjectId> {
        let mut dead = Vec::new();
        let mut pending = vec![region];
        while let Some(id) = pending.pop() {
            let region = &mut self.regions[id.0 as usize];
            if region.dropped_at.is_some() {
                continue;
            }
            region.dropped_at = Some(op);
            trace!(region = %id, objects = region.objects.len(), "deallocated");
            dead.extend_from_slice(&region.objects);
            pending.extend(region.children.iter().copied());
        }
        dead
    }
}
