//! Project session lifecycle.

use std::ptr;

use bridge_core::{BridgeError, Entry, Handle, ProjectEntry, Result, Scope, ScopeConfig};

use crate::alloc::free_one;
use crate::error::{depot_free_error, malloc_error};
use crate::types::{
    DepotAccess, DepotConfig, DepotError, DepotProject, DepotProjectResult, HandleStruct,
};
use crate::universe::universe;
use crate::util::{client_config_from_c, lookup, malloc_handle};

/// Opens a project with the default configuration.
#[no_mangle]
pub unsafe extern "C" fn depot_open_project(access: *mut DepotAccess) -> DepotProjectResult {
    depot_config_open_project(DepotConfig::default(), access)
}

/// Opens a project using an access grant.
///
/// The project owns the root cancellation scope every sub-operation derives
/// from; closing or freeing the project aborts all of them.
#[no_mangle]
pub unsafe extern "C" fn depot_config_open_project(
    config: DepotConfig,
    access: *mut DepotAccess,
) -> DepotProjectResult {
    match open_project_impl(config, access) {
        Ok(project) => DepotProjectResult {
            project,
            error: ptr::null_mut(),
        },
        Err(err) => DepotProjectResult {
            project: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn open_project_impl(
    config: DepotConfig,
    access: *mut DepotAccess,
) -> Result<*mut DepotProject> {
    let universe = universe()?;
    let entry = lookup(universe, access, "access")?;
    let grant = entry
        .as_access()
        .ok_or(BridgeError::InvalidHandle("access"))?
        .grant
        .clone();

    let client_config = client_config_from_c(&config);
    let scope = Scope::root(ScopeConfig {
        temp_directory: client_config.temp_directory.clone(),
    });
    let client = universe.client()?;
    let project = universe
        .runtime()
        .run(&scope, client.open_project(&client_config, grant))?;

    let handle = universe
        .registry()
        .add(Entry::Project(ProjectEntry { scope, project }));
    Ok(malloc_handle(handle.raw()))
}

/// Closes the project and aborts every operation running under it.
/// Closing an already-closed project is a no-op.
#[no_mangle]
pub unsafe extern "C" fn depot_close_project(project: *mut DepotProject) -> *mut DepotError {
    if project.is_null() {
        return ptr::null_mut();
    }
    let Ok(universe) = universe() else {
        return ptr::null_mut();
    };

    let handle = Handle::from_raw((*project).raw());
    let Some(entry) = universe.registry().get(handle) else {
        return ptr::null_mut();
    };
    let Some(project_entry) = entry.as_project() else {
        return malloc_error(&BridgeError::InvalidHandle("project"));
    };
    if universe.registry().del(handle).is_none() {
        // Someone else closed it between the lookup and the delete.
        return ptr::null_mut();
    }

    let result = universe
        .runtime()
        .run(&project_entry.scope, project_entry.project.close());
    project_entry.scope.cancel();
    match result {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err.into()),
    }
}

/// Frees a project result. If the project was not closed, its handle is
/// released and its scope canceled here.
#[no_mangle]
pub unsafe extern "C" fn depot_free_project_result(result: DepotProjectResult) {
    depot_free_error(result.error);
    free_project(result.project);
}

unsafe fn free_project(project: *mut DepotProject) {
    if project.is_null() {
        return;
    }
    let handle = Handle::from_raw((*project).raw());
    if let Ok(universe) = universe() {
        if let Some(entry) = universe.registry().get(handle) {
            if let Some(project_entry) = entry.as_project() {
                universe.registry().del(handle);
                project_entry.scope.cancel();
            }
        }
    }
    free_one(project);
}
