use tokio::sync::watch;

/// Read side of a live value. Subscribers see the latest snapshot and are
/// woken when it is replaced.
pub type Observable<T> = watch::Receiver<T>;

/// Mutable input with change notification.
///
/// Setting a value equal to the current one is a no-op and wakes nobody.
pub struct Property<T> {
    tx: watch::Sender<T>,
}

impl<T> Property<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> Observable<T> {
        self.tx.subscribe()
    }

    /// Notify subscribers without changing the value.
    pub fn touch(&self) {
        self.tx.send_modify(|_| {});
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Edit the value in place. `f` returns whether it changed anything;
    /// subscribers are only woken when it did.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }
}

impl<T: Clone> Property<T> {
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: PartialEq> Property<T> {
    /// Replace the value. Returns `true` when it changed.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }
}

impl<T: Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Replace the published value only if it differs from the current one.
pub(crate) fn publish_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    })
}
