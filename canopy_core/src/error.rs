// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Structural and cross-thread errors abort the offending call and are
//! returned to the caller. Style errors raised while a pulse applies styles
//! are contained per property: they are logged and the property is skipped,
//! so they only surface through the explicit lookup APIs.

use smol_str::SmolStr;
use thiserror::Error;

use crate::node::NodeId;

/// A rejected structural mutation of the node tree.
///
/// The tree is left exactly as it was before the call that returned this
/// error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The handle refers to a destroyed node (or was never issued by this
    /// store).
    #[error("stale node handle {0:?}")]
    StaleNode(NodeId),
    /// The operation needs a container but the node is a leaf or sub-scene.
    #[error("{0:?} is not a container")]
    NotAContainer(NodeId),
    /// Inserting `child` under `parent` would make a node its own ancestor.
    #[error("adding {child:?} to {parent:?} would create a cycle")]
    Cycle {
        /// The container being mutated.
        parent: NodeId,
        /// The node whose insertion was rejected.
        child: NodeId,
    },
    /// `child` would appear twice in the child list of `parent`.
    #[error("{child:?} is already a child of {parent:?}")]
    Duplicate {
        /// The container being mutated.
        parent: NodeId,
        /// The duplicated node.
        child: NodeId,
    },
    /// A node cannot be both a child and the clip of another node.
    #[error("{child:?} is already used as the clip of {owner:?}")]
    ClipConflict {
        /// The node that was rejected.
        child: NodeId,
        /// The node that currently uses it as a clip, or that it was meant
        /// to clip.
        owner: NodeId,
    },
    /// The root of a scene cannot be inserted as a child.
    #[error("{0:?} is the root of a scene")]
    SceneRoot(NodeId),
    /// The node is not a child of the given container.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The container that was searched.
        parent: NodeId,
        /// The node that was not found.
        child: NodeId,
    },
    /// An index was past the end of a child list.
    #[error("index {index} out of bounds for {len} children")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The current number of children.
        len: usize,
    },
    /// The node still has a parent or children and cannot be destroyed.
    #[error("{0:?} is still linked into the tree")]
    StillLinked(NodeId),
}

/// A failure while resolving a style value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StyleError {
    /// A chain of named-value references loops back on itself.
    ///
    /// `chain` lists the names in lookup order, ending with the name that
    /// closed the loop.
    #[error("circular style reference: {}", chain.join(" -> "))]
    ReferenceCycle {
        /// The names visited, ending with the repeated one.
        chain: Vec<SmolStr>,
    },
    /// A named-value reference did not resolve to any declaration.
    #[error("unresolved style reference {0}")]
    UnresolvedReference(SmolStr),
    /// A declared value could not be converted for a property.
    #[error("cannot convert value for {property}: {reason}")]
    Conversion {
        /// Name of the property being converted.
        property: SmolStr,
        /// Human-readable reason.
        reason: String,
    },
    /// The property name is not registered.
    #[error("unknown property {0}")]
    UnknownProperty(SmolStr),
    /// A selector or stylesheet could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A property write that the property system refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The value has the wrong kind for the property.
    #[error("{property} expects a {expected} value")]
    TypeMismatch {
        /// Name of the property.
        property: SmolStr,
        /// The kind the property accepts.
        expected: &'static str,
    },
    /// The property's constraint rejected the value.
    #[error("{property} rejected value: {reason}")]
    Rejected {
        /// Name of the property.
        property: SmolStr,
        /// Human-readable reason.
        reason: String,
    },
    /// Every property id is in use.
    #[error("cannot register {0}: property registry is full")]
    RegistryFull(SmolStr),
}

/// Errors surfaced by [`Scene`](crate::scene::Scene) entry points.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The scene is attached to a surface and the calling thread is neither
    /// the application thread nor inside an access scope.
    #[error("scene mutated off the application thread")]
    WrongThread,
    /// A structural mutation was rejected.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A style operation failed.
    #[error(transparent)]
    Style(#[from] StyleError),
    /// A property write was rejected.
    #[error(transparent)]
    Property(#[from] PropertyError),
}
