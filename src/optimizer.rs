//! Optimierungslogik für die Zusammenstellung von Paketgrößen.
//!
//! Dieser Modul implementiert eine erschöpfende Erreichbarkeitssuche (dynamische
//! Programmierung) über alle Mengen von `0` bis `Bestellmenge + größte Paketgröße`:
//! - Nur ganze Pakete werden versendet
//! - So wenige Artikel wie möglich (mindestens die Bestellmenge)
//! - Bei Gleichstand so wenige Pakete wie möglich
//!
//! Laufzeit und Speicher wachsen linear mit der Suchgrenze. Sehr große
//! Bestellmengen mit kleinen Paketgrößen sind daher teuer; Aufrufer, die eine
//! begrenzte Antwortzeit brauchen, müssen die Bestellmenge vorher begrenzen.

use tracing::debug;

use crate::model::{PackSizes, Shipment};

/// Fehler, die während der Suche auftreten können.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptimizeError {
    /// Keine Menge im Suchbereich ist erreichbar. Mit positiven Paketgrößen
    /// kann das nicht passieren und gilt als Programmfehler.
    #[error("no reachable amount between {order_size} and {bound}")]
    Unreachable { order_size: i64, bound: u64 },
    /// Die Suchgrenze passt nicht in den adressierbaren Speicher.
    #[error("search space for order size {order_size} with largest pack {largest} is too large")]
    SearchSpaceTooLarge { order_size: i64, largest: u64 },
}

/// Eintrag der Erreichbarkeitstabelle.
///
/// Statt die vollständige Zuordnung Größe → Anzahl zu kopieren, merkt sich jeder
/// Eintrag nur das zuletzt hinzugefügte Paket. Einträge unterhalb der aktuell
/// bearbeiteten Menge ändern sich nie mehr, daher ergibt das Zurückverfolgen
/// exakt die Kombination, die beim Kopieren entstanden wäre.
#[derive(Clone, Copy, Debug)]
struct Reachable {
    total_items: u64,
    total_packs: u64,
    last_pack: u64,
}

impl Reachable {
    const ORIGIN: Self = Self {
        total_items: 0,
        total_packs: 0,
        last_pack: 0,
    };

    /// Lexikografischer Vergleich: weniger Artikel zuerst, dann weniger Pakete.
    #[inline]
    fn beats(&self, other: &Self) -> bool {
        self.total_items < other.total_items
            || (self.total_items == other.total_items && self.total_packs < other.total_packs)
    }
}

/// Berechnet die Suchgrenze `Bestellmenge + größte Paketgröße`.
fn search_bound(order_size: u64, pack_sizes: &PackSizes) -> Option<usize> {
    let bound = usize::try_from(order_size.checked_add(pack_sizes.largest())?).ok()?;
    bound.checked_add(1).map(|_| bound)
}

/// Hauptfunktion zur Berechnung der optimalen Paketkombination.
///
/// Füllt die Erreichbarkeitstabelle aufsteigend. Unterhalb der Bestellmenge
/// gewinnt der zuerst gefundene Weg; ab der Bestellmenge ersetzt ein Kandidat
/// den Eintrag, wenn er weniger Artikel oder bei gleicher Artikelzahl weniger
/// Pakete hat. Die Paketgrößen werden in der gespeicherten (absteigenden)
/// Reihenfolge probiert.
///
/// # Parameter
/// * `order_size` - Bestellmenge; Werte `<= 0` ergeben eine leere Lieferung
/// * `pack_sizes` - Validierte Paketgrößen, größte zuerst
///
/// # Rückgabewert
/// `Shipment` mit den gewählten Paketen oder `OptimizeError`
pub fn optimize(order_size: i64, pack_sizes: &PackSizes) -> Result<Shipment, OptimizeError> {
    if order_size <= 0 {
        return Ok(Shipment::empty());
    }

    let order = order_size as u64;
    let too_large = OptimizeError::SearchSpaceTooLarge {
        order_size,
        largest: pack_sizes.largest(),
    };
    let bound = search_bound(order, pack_sizes).ok_or_else(|| too_large.clone())?;
    let threshold = order as usize;

    debug!(
        order_size,
        bound,
        pack_count = pack_sizes.len(),
        "Searching pack combinations"
    );

    let mut table: Vec<Option<Reachable>> = Vec::new();
    table.try_reserve_exact(bound + 1).map_err(|_| too_large)?;
    table.resize(bound + 1, None);
    table[0] = Some(Reachable::ORIGIN);

    for amount in 1..=bound {
        for &pack in pack_sizes.as_slice() {
            let pack_len = pack as usize;
            if pack_len > amount {
                continue;
            }
            let Some(previous) = table[amount - pack_len] else {
                continue;
            };

            let candidate = Reachable {
                total_items: previous.total_items + pack,
                total_packs: previous.total_packs + 1,
                last_pack: pack,
            };

            let accept = match &table[amount] {
                None => true,
                Some(current) => amount >= threshold && candidate.beats(current),
            };
            if accept {
                table[amount] = Some(candidate);
            }
        }
    }

    // Beste Lösung: wenigste Artikel >= Bestellmenge, dann wenigste Pakete
    let mut best: Option<(usize, Reachable)> = None;
    for (amount, entry) in table.iter().enumerate().skip(threshold) {
        let Some(entry) = entry else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((_, current)) => entry.beats(current),
        };
        if better {
            best = Some((amount, *entry));
        }
    }

    let (amount, _) = best.ok_or(OptimizeError::Unreachable {
        order_size,
        bound: bound as u64,
    })?;

    Ok(reconstruct(&table, amount))
}

/// Verfolgt die gespeicherten Pakete von `amount` zurück bis zur Menge `0`.
fn reconstruct(table: &[Option<Reachable>], mut amount: usize) -> Shipment {
    let mut packs = Vec::new();
    while amount > 0 {
        // Jeder Eintrag auf dem Rückweg wurde aus einem erreichbaren Vorgänger gebildet.
        let Some(entry) = table[amount] else {
            break;
        };
        packs.push(entry.last_pack);
        amount -= entry.last_pack as usize;
    }
    Shipment::from_packs(packs)
}
