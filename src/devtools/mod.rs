//=====================================================
// File: devtools/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Group BanglaCode developer tooling
// Objective: Expose the interactive REPL used when no script is given
//=====================================================

pub mod repl;

pub use repl::Repl;

//=====================================================
// End of file
//=====================================================
