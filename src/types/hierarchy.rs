use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::warn;

use super::TypeKey;

/// Borrow a base value out of a sub value, both seen through `Any`.
pub type Upcast = for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>;

fn upcast_ref<Sub, Base>(value: &dyn Any) -> Option<&dyn Any>
where
    Sub: AsRef<Base> + 'static,
    Base: 'static,
{
    value
        .downcast_ref::<Sub>()
        .map(|sub| AsRef::<Base>::as_ref(sub) as &dyn Any)
}

/// A chain of upcasts leading from one type to one of its ancestors.
///
/// The empty chain is the identity (a type is assignable to itself).
#[derive(Clone, Default)]
pub struct UpcastPath {
    steps: Vec<Upcast>,
}

impl UpcastPath {
    pub fn identity() -> Self {
        Self::default()
    }

    /// Number of upcast steps (0 for identity).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Walk the chain. `None` means the value was not of the expected type.
    pub fn apply<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        self.steps.iter().try_fold(value, |current, step| step(current))
    }
}

impl fmt::Debug for UpcastPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpcastPath")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[derive(Clone)]
struct Edge {
    base: TypeKey,
    upcast: Option<Upcast>,
}

/// Builder for [`TypeHierarchy`]. Edges are kept in registration order,
/// which is the order paths are searched in.
#[derive(Default)]
pub struct TypeHierarchyBuilder {
    parents: HashMap<TypeKey, Vec<Edge>>,
    order: Vec<TypeKey>,
}

impl TypeHierarchyBuilder {
    /// `Sub` is a subtype of `Base`; a `Sub` value can be consumed as `&Base`.
    pub fn extends<Sub, Base>(self) -> Self
    where
        Sub: AsRef<Base> + 'static,
        Base: 'static,
    {
        self.edge(
            TypeKey::of::<Sub>(),
            TypeKey::of::<Base>(),
            Some(upcast_ref::<Sub, Base> as Upcast),
        )
    }

    /// `T` is assignable to `Group` but has no value-level upcast.
    ///
    /// Used to group handler types so a single order rule entry can match
    /// every member of the group.
    pub fn tag<T: 'static, Group: 'static>(self) -> Self {
        self.edge(TypeKey::of::<T>(), TypeKey::of::<Group>(), None)
    }

    fn edge(mut self, sub: TypeKey, base: TypeKey, upcast: Option<Upcast>) -> Self {
        if sub == base {
            return self;
        }
        for key in [sub, base] {
            if !self.parents.contains_key(&key) {
                self.parents.insert(key, Vec::new());
                self.order.push(key);
            }
        }
        if let Some(edges) = self.parents.get_mut(&sub) {
            if !edges.iter().any(|e| e.base == base) {
                edges.push(Edge { base, upcast });
            }
        }
        self
    }

    pub fn build(self) -> TypeHierarchy {
        let mut accepted: HashMap<TypeKey, Vec<Edge>> = HashMap::new();
        let mut ancestors: HashMap<TypeKey, HashSet<TypeKey>> = HashMap::new();

        // Accept edges one at a time, refusing any that would close a cycle.
        for sub in &self.order {
            for edge in self.parents.get(sub).into_iter().flatten() {
                let closes_cycle = edge.base == *sub
                    || ancestors
                        .get(&edge.base)
                        .map_or(false, |set| set.contains(sub));
                if closes_cycle {
                    warn!(
                        sub = %sub,
                        base = %edge.base,
                        "ignoring type hierarchy edge that would create a cycle"
                    );
                    continue;
                }
                accepted.entry(*sub).or_default().push(edge.clone());
                ancestors = closure(&self.order, &accepted);
            }
        }

        let mut upcasts = HashMap::new();
        for from in &self.order {
            for (to, path) in upcast_paths(*from, &accepted) {
                upcasts.insert((*from, to), path);
            }
        }

        TypeHierarchy { ancestors, upcasts }
    }
}

fn closure(
    order: &[TypeKey],
    parents: &HashMap<TypeKey, Vec<Edge>>,
) -> HashMap<TypeKey, HashSet<TypeKey>> {
    let mut result = HashMap::new();
    for start in order {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<TypeKey> = VecDeque::from([*start]);
        while let Some(current) = queue.pop_front() {
            for edge in parents.get(&current).into_iter().flatten() {
                if seen.insert(edge.base) {
                    queue.push_back(edge.base);
                }
            }
        }
        result.insert(*start, seen);
    }
    result
}

// Breadth-first over upcast edges only; the first path found to each
// ancestor is kept.
fn upcast_paths(
    from: TypeKey,
    parents: &HashMap<TypeKey, Vec<Edge>>,
) -> Vec<(TypeKey, UpcastPath)> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([(from, UpcastPath::identity())]);
    while let Some((current, path)) = queue.pop_front() {
        for edge in parents.get(&current).into_iter().flatten() {
            let Some(step) = edge.upcast else { continue };
            if !seen.insert(edge.base) {
                continue;
            }
            let mut next = path.clone();
            next.steps.push(step);
            found.push((edge.base, next.clone()));
            queue.push_back((edge.base, next));
        }
    }
    found
}

/// Subtype relation over a closed set of types, built once at startup.
///
/// Answers assignability questions for message types (which handler
/// consumptions apply to a runtime message type) and for handler types
/// (which order rule entry matches a handler).
#[derive(Default)]
pub struct TypeHierarchy {
    ancestors: HashMap<TypeKey, HashSet<TypeKey>>,
    upcasts: HashMap<(TypeKey, TypeKey), UpcastPath>,
}

impl TypeHierarchy {
    pub fn builder() -> TypeHierarchyBuilder {
        TypeHierarchyBuilder::default()
    }

    /// A hierarchy where every type is related only to itself.
    pub fn flat() -> Self {
        Self::default()
    }

    /// True if a `sub` can stand where a `base` is expected (equal or descendant).
    pub fn is_assignable(&self, base: TypeKey, sub: TypeKey) -> bool {
        base == sub
            || self
                .ancestors
                .get(&sub)
                .map_or(false, |set| set.contains(&base))
    }

    pub fn is_strict_subtype(&self, sub: TypeKey, base: TypeKey) -> bool {
        sub != base && self.is_assignable(base, sub)
    }

    /// True if a `from` value can be borrowed as a `to` value.
    pub fn can_upcast(&self, from: TypeKey, to: TypeKey) -> bool {
        from == to || self.upcasts.contains_key(&(from, to))
    }

    pub fn upcast_path(&self, from: TypeKey, to: TypeKey) -> Option<UpcastPath> {
        if from == to {
            return Some(UpcastPath::identity());
        }
        self.upcasts.get(&(from, to)).cloned()
    }

    /// All registered ancestors of `key`, excluding itself, sorted by name.
    pub fn ancestors_of(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut list: Vec<TypeKey> = self
            .ancestors
            .get(&key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        list.sort();
        list
    }
}

impl fmt::Debug for TypeHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHierarchy")
            .field("types", &self.ancestors.len())
            .field("upcasts", &self.upcasts.len())
            .finish()
    }
}
