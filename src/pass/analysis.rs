//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Func, Function, Module};
use crate::utility::SaHashMap;
use smallvec::{smallvec, SmallVec};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

struct All;

/// Models the set of analyses that a given transformation pass preserves.
///
/// This is not a contract that is checked; it is expected that the
/// transform knows what analyses it can preserve. If it reports
/// incorrectly, stale analyses can lead to mis-compilations or panics
/// inside the compiler.
#[derive(Debug)]
pub struct PreservedAnalyses {
    // sorted so we can binary_search for `contains`
    preserved: SmallVec<[TypeId; 2]>,
}

impl PreservedAnalyses {
    /// Returns a [`PreservedAnalyses`] that marks every analysis as
    /// preserved, i.e. reports that the transform changed nothing that
    /// any analysis could observe.
    pub fn all() -> Self {
        Self {
            preserved: smallvec![TypeId::of::<All>()],
        }
    }

    /// Returns a [`PreservedAnalyses`] that marks every analysis
    /// as invalidated.
    pub fn none() -> Self {
        Self {
            preserved: smallvec![],
        }
    }

    /// Checks if *all* analyses are preserved by a given transformation.
    ///
    /// This state cannot be obtained in any way except [`Self::all`].
    pub fn preserves_all(&self) -> bool {
        self.preserved.len() == 1 && self.preserved[0] == TypeId::of::<All>()
    }

    /// Reports that an analysis is preserved by the current transformation.
    pub fn preserve<T: Any>(&mut self) {
        self.insert(TypeId::of::<T>());
    }

    /// Checks whether a specific analysis was preserved.
    pub fn is_preserved(&self, id: TypeId) -> bool {
        self.preserves_all() || self.preserved.binary_search(&id).is_ok()
    }

    /// Gets the intersection of two sets of preserved analyses, returning
    /// the analyses preserved both by `self` and by `other`.
    pub fn intersect(self, other: PreservedAnalyses) -> PreservedAnalyses {
        if self.preserves_all() {
            return other;
        }

        if other.preserves_all() {
            return self;
        }

        let mut result = PreservedAnalyses::none();

        for id in self.preserved {
            if other.is_preserved(id) {
                result.insert(id);
            }
        }

        result
    }

    fn insert(&mut self, id: TypeId) {
        if let Err(slot) = self.preserved.binary_search(&id) {
            self.preserved.insert(slot, id);
        }
    }
}

/// An analysis over a single function, producing some cached result that
/// transform passes can request.
pub trait FunctionAnalysisPass: 'static {
    /// The result type of the analysis.
    type Result: 'static;

    /// Computes the analysis result for `func`. The manager is available
    /// so an analysis can request the analyses it builds on.
    fn run(&mut self, func: &Function, am: &FunctionAnalysisManager) -> Self::Result;
}

trait ErasedFunctionAnalysis {
    fn run_erased(&mut self, func: &Function, am: &FunctionAnalysisManager) -> Rc<dyn Any>;
}

impl<A: FunctionAnalysisPass> ErasedFunctionAnalysis for A {
    fn run_erased(&mut self, func: &Function, am: &FunctionAnalysisManager) -> Rc<dyn Any> {
        Rc::new(self.run(func, am))
    }
}

/// Caches analysis results over functions, keyed by analysis type and
/// function.
///
/// Transform passes request results with [`Self::get`]; after a transform
/// runs, the manager invalidates everything the transform didn't claim to
/// preserve.
#[derive(Default)]
pub struct FunctionAnalysisManager {
    analyses: SaHashMap<TypeId, RefCell<Box<dyn ErasedFunctionAnalysis>>>,
    cache: RefCell<SaHashMap<(TypeId, Func), Rc<dyn Any>>>,
}

impl FunctionAnalysisManager {
    /// Creates a manager with no analyses registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an analysis with the manager. Every analysis that any
    /// pass in the pipeline requests must be registered up front.
    pub fn add_analysis<A: FunctionAnalysisPass>(&mut self, analysis: A) {
        self.analyses
            .insert(TypeId::of::<A>(), RefCell::new(Box::new(analysis)));
    }

    /// Gets the result of an analysis over `func`, computing (and caching)
    /// it if it isn't already cached.
    pub fn get<A: FunctionAnalysisPass>(&self, func: &Function) -> Rc<A::Result> {
        let key = (TypeId::of::<A>(), func.func());

        if let Some(cached) = self.cache.borrow().get(&key) {
            return Rc::clone(cached)
                .downcast()
                .unwrap_or_else(|_| panic!("cached analysis had the wrong type"));
        }

        let cell = self
            .analyses
            .get(&key.0)
            .expect("analysis was requested but never registered");

        // analyses are allowed to request *other* analyses while they run,
        // so the cache borrow must not be held across this call
        let result = cell.borrow_mut().run_erased(func, self);

        self.cache.borrow_mut().insert(key, Rc::clone(&result));

        result
            .downcast()
            .unwrap_or_else(|_| panic!("analysis produced the wrong type"))
    }

    /// Throws away every cached result for `func` that `preserved` does
    /// not claim to be intact.
    pub fn invalidate(&mut self, func: Func, preserved: &PreservedAnalyses) {
        if preserved.preserves_all() {
            return;
        }

        self.cache
            .get_mut()
            .retain(|(id, f), _| *f != func || preserved.is_preserved(*id));
    }
}

/// An analysis over an entire module.
pub trait ModuleAnalysisPass: 'static {
    /// The result type of the analysis.
    type Result: 'static;

    /// Computes the analysis result for `module`.
    fn run(&mut self, module: &Module, am: &ModuleAnalysisManager) -> Self::Result;
}

trait ErasedModuleAnalysis {
    fn run_erased(&mut self, module: &Module, am: &ModuleAnalysisManager) -> Rc<dyn Any>;
}

impl<A: ModuleAnalysisPass> ErasedModuleAnalysis for A {
    fn run_erased(&mut self, module: &Module, am: &ModuleAnalysisManager) -> Rc<dyn Any> {
        Rc::new(self.run(module, am))
    }
}

/// Caches analysis results over a module, and owns the
/// [`FunctionAnalysisManager`] used by function passes running under a
/// module pass manager.
#[derive(Default)]
pub struct ModuleAnalysisManager {
    analyses: SaHashMap<TypeId, RefCell<Box<dyn ErasedModuleAnalysis>>>,
    cache: RefCell<SaHashMap<TypeId, Rc<dyn Any>>>,
    fam: FunctionAnalysisManager,
}

impl ModuleAnalysisManager {
    /// Creates a manager with no analyses registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module analysis with the manager.
    pub fn add_analysis<A: ModuleAnalysisPass>(&mut self, analysis: A) {
        self.analyses
            .insert(TypeId::of::<A>(), RefCell::new(Box::new(analysis)));
    }

    /// Installs the function analysis manager used for function passes
    /// adapted into this module pipeline.
    pub fn set_function_analysis_manager(&mut self, fam: FunctionAnalysisManager) {
        self.fam = fam;
    }

    /// Gets the function analysis manager.
    pub fn function_analysis_manager(&mut self) -> &mut FunctionAnalysisManager {
        &mut self.fam
    }

    /// Gets the result of a module analysis, computing (and caching) it if
    /// it isn't already cached.
    pub fn get<A: ModuleAnalysisPass>(&self, module: &Module) -> Rc<A::Result> {
        let key = TypeId::of::<A>();

        if let Some(cached) = self.cache.borrow().get(&key) {
            return Rc::clone(cached)
                .downcast()
                .unwrap_or_else(|_| panic!("cached analysis had the wrong type"));
        }

        let cell = self
            .analyses
            .get(&key)
            .expect("analysis was requested but never registered");

        let result = cell.borrow_mut().run_erased(module, self);

        self.cache.borrow_mut().insert(key, Rc::clone(&result));

        result
            .downcast()
            .unwrap_or_else(|_| panic!("analysis produced the wrong type"))
    }

    /// Throws away every cached module-level result that `preserved` does
    /// not claim to be intact.
    pub fn invalidate(&mut self, preserved: &PreservedAnalyses) {
        if preserved.preserves_all() {
            return;
        }

        self.cache
            .get_mut()
            .retain(|id, _| preserved.is_preserved(*id));
    }
}
