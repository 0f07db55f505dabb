use core::marker::PhantomData;

pub mod cost;
pub mod operators;
pub mod symbol;

pub use cost::{Cost, MatchCost};
pub use operators::{OperatorDetails, OperatorMap};
pub use symbol::{
  CoreTypeNames, Field, MethodId, MethodSymbol, Parameter, SymbolCategory, SymbolGraph, TypeId, TypeKind, TypeSymbol,
};

/// Typed index into a [`Store`].
///
/// The marker is `fn() -> T` so ids stay `Send + Sync` and can cross the
/// parallel lowering threads together with the read-only symbol graph.
#[repr(transparent)]
pub struct Id<T>(u32, PhantomData<fn() -> T>);

impl<T> Id<T> {
  pub fn new(index: u32) -> Self {
    Self(index, PhantomData)
  }

  pub fn index(&self) -> u32 {
    self.0
  }
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> PartialEq for Id<T> {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.0 == other.0
  }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
  fn hash<H: std::hash::Hasher>(
    &self,
    state: &mut H,
  ) {
    self.0.hash(state);
  }
}

impl<T> std::fmt::Debug for Id<T> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Append-only arena; ids are handed out in allocation order.
#[derive(Debug, Clone)]
pub struct Store<T> {
  data: Vec<T>,
}

impl<T> Store<T> {
  pub fn new() -> Self {
    Self { data: Vec::new() }
  }

  pub fn alloc(
    &mut self,
    v: T,
  ) -> Id<T> {
    let id = Id::new(self.data.len() as u32);
    self.data.push(v);
    id
  }

  pub fn get(
    &self,
    id: &Id<T>,
  ) -> &T {
    &self.data[id.0 as usize]
  }

  pub fn get_mut(
    &mut self,
    id: &Id<T>,
  ) -> &mut T {
    &mut self.data[id.0 as usize]
  }

  pub fn try_get(
    &self,
    id: &Id<T>,
  ) -> Option<&T> {
    self.data.get(id.0 as usize)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
    self.data.iter().enumerate().map(|(idx, v)| (Id::new(idx as u32), v))
  }
}

impl<T> Default for Store<T> {
  fn default() -> Self {
    Self::new()
  }
}
